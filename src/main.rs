fn main() {
    if let Err(e) = dualmind_lib::run() {
        eprintln!("dualmind: {e}");
        std::process::exit(1);
    }
}
