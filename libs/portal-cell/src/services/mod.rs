pub mod access;
pub mod achievements;
pub mod tasks;
pub mod views;

pub use access::AccessService;
pub use achievements::AchievementService;
pub use tasks::TaskService;
pub use views::PortalViewService;
