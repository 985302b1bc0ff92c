use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Qualifier that is really the archive extension of a versioned file name
/// (`name_1.2.3.jar`) and therefore not part of the version.
const ARCHIVE_MARKER: &str = "jar";

/// Dotted version `major.minor.micro[.qualifier]`.
///
/// Parsing never fails: unreadable segments become `0`. Ordering and
/// equality only look at the three segments and the qualifier;
/// [`Version::is_well_formed`] reports whether the text was fully readable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
    #[serde(skip)]
    well_formed: bool,
}

impl Version {
    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
            well_formed: true,
        }
    }

    /// Lenient left-to-right parse.
    ///
    /// Up to three numeric segments are read. The first token that is not a
    /// plain number stops parsing: its leading digits (if any) fill the
    /// current segment and the rest of the token, up to the next dot, becomes
    /// the qualifier. A fourth token is always the qualifier. A qualifier equal
    /// to the archive marker is dropped.
    pub fn parse(text: &str) -> Self {
        let mut version = Version {
            well_formed: !text.is_empty(),
            ..Version::default()
        };
        let mut segments = [0u32; 3];
        let mut index = 0;

        for token in text.split('.') {
            if index == 3 {
                version.qualifier = qualifier_from(token);
                break;
            }

            let digits = token.len() - token.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            let (number, rest) = token.split_at(digits);
            segments[index] = parse_segment(number);

            if number.is_empty() || !rest.is_empty() {
                // leading digits (if any) stay in the segment, the rest qualifies
                version.well_formed = false;
                version.qualifier = qualifier_from(rest);
                break;
            }
            index += 1;
        }

        version.major = segments[0];
        version.minor = segments[1];
        version.micro = segments[2];
        version
    }

    /// False when some part of the source text had to be guessed.
    pub fn is_well_formed(&self) -> bool {
        self.well_formed
    }

    fn key(&self) -> (u32, u32, u32, &str) {
        (self.major, self.minor, self.micro, self.qualifier.as_str())
    }
}

fn parse_segment(digits: &str) -> u32 {
    // overlong segments saturate instead of wrapping
    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(u32::MAX)
    }
}

fn qualifier_from(token: &str) -> String {
    if token.eq_ignore_ascii_case(ARCHIVE_MARKER) {
        String::new()
    } else {
        token.to_string()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl From<&str> for Version {
    fn from(text: &str) -> Self {
        Version::parse(text)
    }
}

/// Compare two version strings segment by segment, then by qualifier.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    Version::parse(left).cmp(&Version::parse(right))
}
