// This binary crate is intentionally minimal.
// All training-driver logic lives in the library (src/lib.rs and its modules).
// Run the demo with:
//   cargo run --example twotask
fn main() {
    println!("multitrain: a generalized multi-task training loop driver.");
    println!("Run `cargo run --example twotask` to see the two-task demo.");
}
