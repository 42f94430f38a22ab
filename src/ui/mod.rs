mod dashboard;

pub use dashboard::render;
