fn main() {
    cb_cli::init_tracing();
    std::process::exit(cb_cli::run_cli_from_args(std::env::args_os()));
}
