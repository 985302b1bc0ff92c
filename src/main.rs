fn main() {
    std::process::exit(runtime_launcher::run());
}
