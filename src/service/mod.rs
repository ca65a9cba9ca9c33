pub mod daemon;
pub mod enhancement;
pub mod signals;

pub use daemon::{
    ProductionController, ServiceManager, attach_production_controller,
    build_production_controller, notify_daemon, read_daemon_pid,
};
pub use enhancement::{ControllerHandle, EnhancementService, EventReceiver, event_channel};
