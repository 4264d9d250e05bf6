fn main() {
    if let Err(e) = sensai_db::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
