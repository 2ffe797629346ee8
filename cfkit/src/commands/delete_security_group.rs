use std::sync::Arc;

use cfkit_client::Filter;
use clap::Args;

use crate::CommandError;
use crate::clients::new_clients;
use crate::config::Config;
use crate::ui::Ui;

/// Arguments of `delete-security-group`.
#[derive(Args, Clone, Debug, PartialEq)]
pub struct DeleteSecurityGroupArgs {
    /// Name of the security group to delete
    #[arg(value_name = "SECURITY_GROUP")]
    pub security_group: String,

    /// Force deletion without confirmation
    #[arg(short = 'f')]
    pub force: bool,
}

/// Deletes a security group by name.
pub struct DeleteSecurityGroup {
    config: Arc<dyn Config>,
    ui: Arc<dyn Ui>,
}

impl DeleteSecurityGroup {
    pub fn new(config: Arc<dyn Config>, ui: Arc<dyn Ui>) -> Self {
        Self { config, ui }
    }

    pub async fn execute(&self, args: &DeleteSecurityGroupArgs) -> Result<(), CommandError> {
        self.check_requirements()?;
        let (client, _uaa) = new_clients(self.config.as_ref(), self.ui.clone()).await?;

        let name = &args.security_group;
        let user = self.config.current_user().unwrap_or_default();
        self.ui
            .display_text(&format!("Deleting security group {} as {}...", name, user));

        if !args.force {
            let prompt = format!("Really delete the security group {}?", name);
            if !self.ui.display_boolean_prompt(false, &prompt)? {
                return Ok(());
            }
        }

        let groups = client.get_security_groups(&[Filter::name(name)]).await?;
        let Some(group) = groups.into_iter().next() else {
            self.ui.display_ok();
            self.ui
                .display_warning(&format!("Security group {} does not exist", name));
            return Ok(());
        };

        tracing::debug!(guid = %group.guid, "deleting security group");
        client.delete_security_group(&group.guid).await?;
        self.ui.display_ok();
        Ok(())
    }

    fn check_requirements(&self) -> Result<(), CommandError> {
        let binary_name = self.config.binary_name().to_string();
        if self.config.target().is_empty() {
            return Err(CommandError::NoApiSet { binary_name });
        }
        if !self.config.is_logged_in() {
            return Err(CommandError::NotLoggedIn { binary_name });
        }
        Ok(())
    }
}
