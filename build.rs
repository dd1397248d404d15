fn main() {
    // Rebuild if the render shader changes (embedded via include_str!)
    println!("cargo:rerun-if-changed=shaders/particles.wgsl");
    // Compute kernels are read from disk at task build time
    println!("cargo:rerun-if-changed=kernels/apply_vel.wgsl");
    println!("cargo:rerun-if-changed=kernels/init_cube.wgsl");
}
