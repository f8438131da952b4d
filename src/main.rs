fn main() -> std::process::ExitCode {
    labvault_lib::run()
}
