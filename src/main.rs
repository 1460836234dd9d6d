fn main() -> std::process::ExitCode {
    goalpost_lib::run()
}
