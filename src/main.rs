fn main() {
    fincore_bin::run();
}
