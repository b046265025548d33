pub mod complex;
pub mod config;
pub mod functions;
pub mod projection;
pub mod renderer;
pub mod scene;
pub mod streamline;
pub mod telemetry;
