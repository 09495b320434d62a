pub const VERIFICATION_SUBJECT: &str = "Verify your email address";

/// Subject and HTML body of the sign-up verification email.
pub fn verification_email(full_name: &str, link: &str) -> (String, String) {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
    <h2>Welcome, {name}!</h2>
    <p>Thanks for signing up. Please confirm your email address by clicking the button below.</p>
    <p>
        <a href="{link}" style="display: inline-block; padding: 12px 24px; background: #2563eb; color: #fff; text-decoration: none; border-radius: 6px;">Verify Email</a>
    </p>
    <p>Or paste this link into your browser:<br><a href="{link}">{link}</a></p>
    <p>This link will expire in 24 hours.</p>
    <p>If you did not create an account, you can ignore this email.</p>
</body>
</html>"#,
        name = escape_html(full_name),
        link = escape_html(link),
    );
    (VERIFICATION_SUBJECT.to_string(), html)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
