fn main() {
    if let Err(err) = grn_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
