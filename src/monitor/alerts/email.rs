// Email Alert Channel - HTML mail over an implicit-TLS SMTP session, using lettre

use crate::error::{ChannelError, SmtpStage};
use crate::monitor::alerts::{AlertChannel, AlertMessage};
use crate::monitor::config::EmailConfig;
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use handlebars::Handlebars;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::{Address, Message};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const TEMPLATE_NAME: &str = "alert_email";
const MAIL_TITLE: &str = "Certificate Expiry Alert";
const MAIL_BANNER: &str = "SSL certificate expiry alert";

/// Built-in HTML body. Handlebars fields: `title`, `alert_banner` (optional),
/// `content`, `year`, `company_name`.
pub const DEFAULT_EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { background-color: #f8f8f8; padding: 15px; text-align: center; }
        .content { padding: 20px; background-color: #ffffff; }
        .footer { margin-top: 20px; padding: 10px; text-align: center; font-size: 12px; color: #777; }
        .alert { background-color: #fff3cd; padding: 15px; margin-bottom: 15px; border-left: 5px solid #ffc107; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h2>System Notification</h2>
        </div>
        <div class="content">
            <h3>{{title}}</h3>
            {{#if alert_banner}}
            <div class="alert">
                {{alert_banner}}
            </div>
            {{/if}}
            <p>{{content}}</p>
            <p>If you were not expecting this message, please ignore it or contact your administrator.</p>
        </div>
        <div class="footer">
            <p>&copy; {{year}} {{company_name}}. All rights reserved.</p>
        </div>
    </div>
</body>
</html>"#;

/// Values substituted into the email template
#[derive(Debug, Clone, Serialize)]
pub struct MailData {
    pub title: String,
    pub alert_banner: Option<String>,
    pub content: String,
    pub company_name: String,
    pub year: i32,
}

/// Opens SMTP sessions. The production implementation is [`LettreConnector`].
pub trait SmtpConnector: Send + Sync {
    fn connect(&self, config: &EmailConfig) -> Result<Box<dyn SmtpSession>, String>;
}

/// One connected, TLS-wrapped SMTP session
pub trait SmtpSession: Send {
    fn authenticate(&mut self, username: &str, password: &str) -> Result<(), String>;
    fn mail_from(&mut self, from: &Address) -> Result<(), String>;
    fn rcpt_to(&mut self, to: &Address) -> Result<(), String>;
    fn open_data(&mut self) -> Result<(), String>;
    fn write_data(&mut self, message: &[u8]) -> Result<(), String>;
    fn quit(&mut self) -> Result<(), String>;
    /// Drop the connection without completing the transaction
    fn abort(&mut self);
}

/// Progress of a single mail transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionState {
    Connected,
    Authenticated,
    SenderDeclared,
    RecipientsDeclared(usize),
    DataOpen,
    DataWritten,
    Closed,
    Failed(SmtpStage),
}

/// Drives a session through AUTH, MAIL, RCPT, DATA and QUIT.
///
/// Any failing stage moves to `Failed` and aborts the connection; recipients
/// already accepted are abandoned, SMTP has no way to take them back.
pub struct SmtpTransaction {
    session: Box<dyn SmtpSession>,
    state: TransactionState,
}

impl SmtpTransaction {
    pub fn new(session: Box<dyn SmtpSession>) -> Self {
        Self {
            session,
            state: TransactionState::Connected,
        }
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    pub fn run(
        &mut self,
        credentials: (&str, &str),
        from: &Address,
        recipients: &[Address],
        message: &[u8],
    ) -> Result<(), ChannelError> {
        let (username, password) = credentials;

        self.step(SmtpStage::Authenticate, TransactionState::Authenticated, |s| {
            s.authenticate(username, password)
        })?;
        self.step(SmtpStage::MailFrom, TransactionState::SenderDeclared, |s| {
            s.mail_from(from)
        })?;
        for (i, rcpt) in recipients.iter().enumerate() {
            self.step(
                SmtpStage::RcptTo(rcpt.to_string()),
                TransactionState::RecipientsDeclared(i + 1),
                |s| s.rcpt_to(rcpt),
            )?;
        }
        self.step(SmtpStage::DataOpen, TransactionState::DataOpen, |s| {
            s.open_data()
        })?;
        self.step(SmtpStage::DataWrite, TransactionState::DataWritten, |s| {
            s.write_data(message)
        })?;
        self.step(SmtpStage::Quit, TransactionState::Closed, |s| s.quit())
    }

    fn step<F>(&mut self, stage: SmtpStage, next: TransactionState, f: F) -> Result<(), ChannelError>
    where
        F: FnOnce(&mut Box<dyn SmtpSession>) -> Result<(), String>,
    {
        match f(&mut self.session) {
            Ok(()) => {
                tracing::trace!("SMTP {:?} -> {:?}", self.state, next);
                self.state = next;
                Ok(())
            }
            Err(details) => {
                self.state = TransactionState::Failed(stage.clone());
                if stage != SmtpStage::Quit {
                    self.session.abort();
                }
                Err(ChannelError::smtp(stage, details))
            }
        }
    }
}

/// SMTP over implicit TLS via lettre's low-level connection
pub struct LettreConnector;

impl SmtpConnector for LettreConnector {
    fn connect(&self, config: &EmailConfig) -> Result<Box<dyn SmtpSession>, String> {
        if config.accept_invalid_certs {
            tracing::warn!(
                "Certificate verification disabled for SMTP relay {}",
                config.smtp_server
            );
        }

        let tls = TlsParameters::builder(config.smtp_server.clone())
            .dangerous_accept_invalid_certs(config.accept_invalid_certs)
            .build_rustls()
            .map_err(|e| format!("TLS setup failed: {}", e))?;

        let connection = SmtpConnection::connect(
            (config.smtp_server.as_str(), config.smtp_port),
            Some(Duration::from_secs(config.timeout_seconds)),
            &ClientId::default(),
            Some(&tls),
            None,
        )
        .map_err(|e| e.to_string())?;

        Ok(Box::new(LettreSession { connection }))
    }
}

struct LettreSession {
    connection: SmtpConnection,
}

impl SmtpSession for LettreSession {
    fn authenticate(&mut self, username: &str, password: &str) -> Result<(), String> {
        let credentials = Credentials::new(username.to_string(), password.to_string());
        self.connection
            .auth(&[Mechanism::Plain], &credentials)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn mail_from(&mut self, from: &Address) -> Result<(), String> {
        self.connection
            .command(Mail::new(Some(from.clone()), vec![]))
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn rcpt_to(&mut self, to: &Address) -> Result<(), String> {
        self.connection
            .command(Rcpt::new(to.clone(), vec![]))
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn open_data(&mut self) -> Result<(), String> {
        self.connection
            .command(Data)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn write_data(&mut self, message: &[u8]) -> Result<(), String> {
        self.connection
            .message(message)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn quit(&mut self) -> Result<(), String> {
        self.connection
            .quit()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn abort(&mut self) {
        self.connection.abort();
    }
}

/// Email alert channel
pub struct EmailChannel {
    config: EmailConfig,
    templates: Handlebars<'static>,
    connector: Arc<dyn SmtpConnector>,
}

impl EmailChannel {
    /// Create new email channel with the built-in template
    pub fn new(config: EmailConfig) -> Result<Self, ChannelError> {
        Self::with_template(config, DEFAULT_EMAIL_TEMPLATE)
    }

    /// Create new email channel with a custom HTML template
    pub fn with_template(config: EmailConfig, template: &str) -> Result<Self, ChannelError> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| ChannelError::payload(format!("invalid email template: {}", e)))?;

        Ok(Self {
            config,
            templates,
            connector: Arc::new(LettreConnector),
        })
    }

    /// Replace the SMTP connector
    pub fn with_connector(mut self, connector: Arc<dyn SmtpConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Render the HTML body for an alert
    pub fn render_body(&self, message: &AlertMessage) -> Result<String, ChannelError> {
        let data = MailData {
            title: MAIL_TITLE.to_string(),
            alert_banner: Some(MAIL_BANNER.to_string()),
            content: message.display_text(),
            company_name: self.config.from_name.clone(),
            year: Utc::now().year(),
        };

        self.templates
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| ChannelError::payload(format!("render email template: {}", e)))
    }

    /// Build the MIME message (multipart/mixed with one HTML part)
    pub fn build_message(&self, html_body: String) -> Result<Message, ChannelError> {
        let from = Mailbox::new(Some(self.config.from_name.clone()), parse_address(&self.config.from)?);

        let mut builder = Message::builder()
            .message_id(None)
            .date_now()
            .from(from)
            .subject(MAIL_TITLE);

        for to in &self.config.to {
            builder = builder.to(Mailbox::new(None, parse_address(to)?));
        }

        for cc in &self.config.cc {
            builder = builder.cc(Mailbox::new(None, parse_address(cc)?));
        }

        builder
            .multipart(MultiPart::mixed().singlepart(SinglePart::html(html_body)))
            .map_err(|e| ChannelError::payload(format!("build email: {}", e)))
    }

    fn recipients(&self) -> Result<Vec<Address>, ChannelError> {
        self.config
            .to
            .iter()
            .chain(self.config.cc.iter())
            .map(|addr| parse_address(addr))
            .collect()
    }
}

fn parse_address(addr: &str) -> Result<Address, ChannelError> {
    addr.trim()
        .parse::<Address>()
        .map_err(|e| ChannelError::payload(format!("invalid email address {:?}: {}", addr, e)))
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn channel_name(&self) -> &str {
        "Email"
    }

    async fn send_alert(&self, message: &AlertMessage) -> Result<(), ChannelError> {
        if !self.config.enabled || self.config.to.is_empty() {
            return Ok(());
        }

        let html_body = self.render_body(message)?;
        let mail = self.build_message(html_body)?;
        let from = parse_address(&self.config.from)?;
        let recipients = self.recipients()?;
        let body = mail.formatted();

        let connector = Arc::clone(&self.connector);
        let config = self.config.clone();

        // lettre's SmtpConnection is blocking
        tokio::task::spawn_blocking(move || {
            let session = connector
                .connect(&config)
                .map_err(|e| ChannelError::smtp(SmtpStage::Connect, e))?;

            let mut transaction = SmtpTransaction::new(session);
            transaction.run(
                (config.smtp_username.as_str(), config.smtp_password.as_str()),
                &from,
                &recipients,
                &body,
            )
        })
        .await
        .map_err(|e| ChannelError::Task {
            details: e.to_string(),
        })?
    }
}
