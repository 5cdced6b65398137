fn main() {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
    coinboard::app::logging::init();
    if let Err(err) = coinboard::app::cli::run() {
        eprintln!("error: {}", err.message);
        std::process::exit(1);
    }
}
