//! Binary entry point; all logic lives in the library's `app` module.

fn main() {
    gravity_points::app::run();
}
