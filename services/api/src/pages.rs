//! Minimal server-rendered pages. Each protected page carries nothing
//! beyond the session identity; the login and signup pages re-render with
//! every collected validation message.

use admitdesk::admissions::FormErrors;

pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{} - AdmitDesk</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

fn error_list(errors: &FormErrors) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .messages()
        .iter()
        .map(|message| format!("<li>{}</li>", escape(message)))
        .collect();
    format!("<ul class=\"errors\">{items}</ul>")
}

pub(crate) fn login(errors: &FormErrors, notice: Option<&str>, next: Option<&str>) -> String {
    let notice = notice
        .map(|text| format!("<p class=\"notice\">{}</p>", escape(text)))
        .unwrap_or_default();
    let action = match next {
        Some(next) => format!("/login?next={}", escape(next)),
        None => "/login".to_string(),
    };
    let body = format!(
        "<h1>Sign in</h1>\n{notice}{errors}\n<form method=\"post\" action=\"{action}\">\n<label>Username <input name=\"username\" maxlength=\"150\"></label>\n<label>Password <input name=\"password\" type=\"password\"></label>\n<label><input name=\"remember_me\" type=\"checkbox\" value=\"on\"> Remember me</label>\n<button type=\"submit\">Login</button>\n</form>\n<p><a href=\"/signup\">Create an account</a></p>",
        errors = error_list(errors),
    );
    shell("Login", &body)
}

pub(crate) fn signup(errors: &FormErrors) -> String {
    let body = format!(
        "<h1>Create account</h1>\n{errors}\n<form method=\"post\" action=\"/signup\">\n<label>Username <input name=\"username\" maxlength=\"150\"></label>\n<label>Email <input name=\"email\" type=\"email\"></label>\n<label>Password <input name=\"password1\" type=\"password\"></label>\n<label>Confirm password <input name=\"password2\" type=\"password\"></label>\n<button type=\"submit\">Sign up</button>\n</form>\n<p><a href=\"/login\">Back to login</a></p>",
        errors = error_list(errors),
    );
    shell("Signup", &body)
}

pub(crate) fn home() -> String {
    shell(
        "Welcome",
        "<h1>AdmitDesk</h1>\n<p>Admissions office CRM.</p>\n<p><a href=\"/login\">Sign in</a></p>",
    )
}

pub(crate) fn named(title: &str, username: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>Signed in as {}.</p>\n<nav><a href=\"/dashboard\">Dashboard</a> | <a href=\"/leads\">Leads</a> | <a href=\"/applications\">Applications</a> | <a href=\"/exams\">Exams</a> | <a href=\"/finance\">Finance</a> | <a href=\"/settings\">Settings</a> | <a href=\"/logout\">Logout</a></nav>",
        escape(title),
        escape(username)
    );
    shell(title, &body)
}
