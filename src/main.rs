fn main() {
    #[cfg(feature = "cli")]
    chunkflate::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("chunkflate: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
