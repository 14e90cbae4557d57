fn main() {
    if let Err(error) = stepwise_cli::run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
