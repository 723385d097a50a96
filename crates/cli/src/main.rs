//! The p2v-firstboot binary: first-boot fixups for P2V-migrated images.

fn main() {
    p2v_utils::initialize_tracing();
    if let Err(e) = p2v_firstboot_lib::cli::run() {
        // One-line diagnostic identifying the failed check or mutation
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
