fn main() {
    // ESP-IDF link/env passthrough — only meaningful for espidf builds.
    // Host (test) builds skip it so no toolchain env is required.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
