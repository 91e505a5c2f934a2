fn main() {
    if let Err(err) = gitops_guard::cli::run() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
