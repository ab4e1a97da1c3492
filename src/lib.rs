pub mod csv_loader;
pub mod dispatcher;
pub mod double_nod;
pub mod engine;
pub mod hid;
pub mod nod_detector;
pub mod scheduler;
pub mod shake_detector;
pub mod synth;
pub mod types;
