use matchmaking_shared::config::Stage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const ADMIN_CREATE_USER: &str = "CustomMessage_AdminCreateUser";
const FORGOT_PASSWORD: &str = "CustomMessage_ForgotPassword";

const SUPPORT_EMAIL: &str = "sarah@facinghomelessness.org";

/// The custom message trigger event. Fields this lambda does not touch are
/// carried through untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMessageEvent {
    pub trigger_source: String,
    #[serde(default)]
    pub request: MessageRequest,
    #[serde(default)]
    pub response: MessageResponse,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    #[serde(default)]
    pub user_attributes: BTreeMap<String, String>,
    pub code_parameter: Option<String>,
    pub username_parameter: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub sms_message: Option<String>,
    pub email_message: Option<String>,
    pub email_subject: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl MessageRequest {
    fn attribute(&self, name: &str) -> &str {
        self.user_attributes.get(name).map(String::as_str).unwrap_or_default()
    }

    fn full_name(&self) -> String {
        format!("{} {}", self.attribute("given_name"), self.attribute("family_name"))
    }
}

/// Fills in the subject and HTML body for the trigger sources we brand.
/// Returns false when the event is left as it came.
pub fn customize(event: &mut CustomMessageEvent, stage: Stage) -> bool {
    let (subject, body) = match event.trigger_source.as_str() {
        ADMIN_CREATE_USER => (
            "Welcome to The BLOCK Project Matchmaking System",
            welcome_email(&event.request, stage),
        ),
        FORGOT_PASSWORD => (
            "Password reset for The BLOCK Project Matchmaking System",
            password_reset_email(&event.request),
        ),
        _ => return false,
    };

    event.response.email_subject = Some(subject.to_string());
    event.response.email_message = Some(body);
    true
}

fn page(heading: &str, content: &[String]) -> String {
    let mut lines = vec![
        "<html>".to_string(),
        "  <head>".to_string(),
        "    <link href=\"https://fonts.googleapis.com/css?family=Source+Sans+Pro\" rel=\"stylesheet\" type=\"text/css\">".to_string(),
        "  </head>".to_string(),
        "  <body style=\"width: 60%;margin: 0 auto; font-family: source sans pro\">".to_string(),
        "    <section style=\"margin-top: 2em; background-color: black; padding: 1em 3em\">".to_string(),
        format!("      <h1 style=\"text-align:center; color: white\"><b>{}</b></h1>", heading),
        "    </section>".to_string(),
        "    <section style=\"color: black; border-style: solid; border-color: black; padding: 1em 3em\">".to_string(),
    ];
    lines.extend(content.iter().cloned());
    lines.extend(
        [
            "      <p>",
            "        Warmly,",
            "        <br>",
            "        The BLOCK Project Team",
            "      </p>",
            "    </section>",
            "  </body>",
            "</html>",
        ]
        .map(str::to_string),
    );
    lines.join("\n")
}

fn welcome_email(request: &MessageRequest, stage: Stage) -> String {
    let username = request.username_parameter.as_deref().unwrap_or_default();
    let password = request.code_parameter.as_deref().unwrap_or_default();

    page(
        "Welcome to The BLOCK Project Matchmaking System",
        &[
            "      <p style=\"line-height:1.5em\">".to_string(),
            format!("        Hi {},", request.full_name()),
            "      </p>".to_string(),
            "      <p style=\"line-height:1.5em\">".to_string(),
            "        We are so blessed to have you with us. To sign in the system, please click".to_string(),
            format!(
                "        <a style=\"color:black\" href=\"http://{}\" target=\"_blank\">THIS LINK</a>",
                stage.domain()
            ),
            "        and enter the following information:".to_string(),
            "      </p>".to_string(),
            "      <ul style=\"padding-left: 1em\">".to_string(),
            format!("        <li><b>Email:</b> {}</li>", username),
            format!("        <li><b>Password:</b> {}</li>", password),
            "      </ul>".to_string(),
            "      <p style=\"line-height:1.5em\">".to_string(),
            "        This is a temporary password and you will be asked to change it after signing in.".to_string(),
            "        If you have any issue signing in, feel free to contact Sarah at".to_string(),
            format!(
                "        <a style=\"color:black\" href=\"mailto:{0}\" target=\"_blank\">{0}</a>.",
                SUPPORT_EMAIL
            ),
            "      </p>".to_string(),
            "      <br>".to_string(),
        ],
    )
}

fn password_reset_email(request: &MessageRequest) -> String {
    let code = request.code_parameter.as_deref().unwrap_or_default();

    page(
        "Forgot Your Password? No Problem!",
        &[
            "      <p style=\"line-height:1.5em\">".to_string(),
            format!("        Hi {},", request.full_name()),
            "      </p>".to_string(),
            "      <p style=\"color: black; line-height:1.5em\">".to_string(),
            format!(
                "        Here is the confirmation code you can use to reset your password: <b>{}</b>",
                code
            ),
            "      </p>".to_string(),
            "      <p style=\"line-height:1.5em\">".to_string(),
            "        If you did not request a password reset, you can ignore the email; no changes have been made.".to_string(),
            "        <br>".to_string(),
            "        Any other issues resetting your password? Feel free to contact Sarah at".to_string(),
            format!(
                "        <a style=\"color:black\" href=\"mailto:{0}\">{0}</a>.",
                SUPPORT_EMAIL
            ),
            "      </p>".to_string(),
        ],
    )
}
