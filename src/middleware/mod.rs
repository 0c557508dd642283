pub mod navigation_gate;
pub mod session_context;
