fn main() {
    pretext::cli::run();
}
