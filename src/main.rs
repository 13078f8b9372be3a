fn main() {
    if let Err(err) = agora::run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
