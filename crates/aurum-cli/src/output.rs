pub fn print_banner() {
    println!(
        "aurum {} (git {}, {}, target {})",
        env!("CARGO_PKG_VERSION"),
        env!("AURUM_GIT_SHA"),
        env!("AURUM_RUSTC_VERSION"),
        env!("AURUM_TARGET"),
    );
}
