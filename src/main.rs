fn main() {
    if let Err(err) = lifecycle::main() {
        eprintln!("Error: {}", err);

        for cause in err.iter_causes() {
            eprintln!("Caused by: {}", cause);
        }
    }
}
