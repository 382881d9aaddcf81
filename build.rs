use shadow_rs::ShadowBuilder;

// Emits `shadow.rs` with the version and git metadata shown by `--version`
fn main() {
    ShadowBuilder::builder()
        .build()
        .expect("failed to generate build metadata");
}
