//! Command implementations.
//!
//! A command checks its requirements against the [`Config`](crate::config::Config),
//! builds clients with [`new_clients`](crate::clients::new_clients) and reports
//! progress through the [`Ui`](crate::ui::Ui).

mod delete_security_group;

pub use delete_security_group::{DeleteSecurityGroup, DeleteSecurityGroupArgs};
