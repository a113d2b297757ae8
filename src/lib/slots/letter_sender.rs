use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use lettre::Transport;
use log::{error, info};

use super::{
    helpers::generate_email,
    models::{MailConfig, Viewer},
};

/// Result of one mailing round.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub sent: usize,
    /// Student ids whose letter could not be built or sent
    pub failed: BTreeSet<String>,
}

/// A trait, necessary for every entity that will build and send letters.
pub trait LetterSender {
    /// Sends one letter per viewer with a diff. A failed letter is logged,
    /// skipped and reported back.
    fn form_and_send_letters(
        &self,
        viewers: &[Viewer],
        mail: &MailConfig,
        changed: &BTreeMap<String, String>,
    ) -> Delivery;
}

/// Any lettre transport can deliver the letters: SMTP in production, the stub in tests.
impl<T> LetterSender for T
where
    T: Transport,
    T::Ok: fmt::Debug,
    T::Error: fmt::Display,
{
    fn form_and_send_letters(
        &self,
        viewers: &[Viewer],
        mail: &MailConfig,
        changed: &BTreeMap<String, String>,
    ) -> Delivery {
        let mut delivery = Delivery::default();
        for viewer in viewers.iter() {
            let Some(diff) = changed.get(&viewer.student_id) else {
                continue;
            };
            let email = match generate_email(mail, viewer, diff) {
                Ok(email) => email,
                Err(e) => {
                    error!("Could not build letter for {}: {}", viewer.name, e);
                    delivery.failed.insert(viewer.student_id.to_owned());
                    continue;
                }
            };
            match self.send(&email) {
                Ok(code) => {
                    info!("Sent email to {} with response {:?}", viewer.name, code);
                    delivery.sent += 1;
                }
                Err(e) => {
                    error!("Could not send email to {}: {}", viewer.name, e);
                    delivery.failed.insert(viewer.student_id.to_owned());
                }
            }
        }
        delivery
    }
}
