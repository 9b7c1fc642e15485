/// Subject and plain-text body for the signup verification email.
pub fn verification_email(code: &str) -> (String, String) {
    let body = format!(
        "Welcome!\n\
        \n\
        Please verify your email address using the following code:\n\
        \n\
        {}\n\
        \n\
        This code will expire in 24 hours.\n\
        \n\
        If you did not create an account, you can ignore this email.",
        code
    );
    ("Verify your email".to_string(), body)
}

/// Sent once the address is verified.
pub fn welcome_email(name: &str) -> (String, String) {
    let body = format!(
        "Hello {},\n\
        \n\
        Your email address has been verified and your account is ready to use.\n\
        \n\
        Thanks for joining us!",
        name
    );
    ("Welcome aboard".to_string(), body)
}

pub fn password_reset_email(reset_url: &str) -> (String, String) {
    let body = format!(
        "Hello,\n\
        \n\
        A password reset was requested for your account.\n\
        \n\
        To choose a new password, open the link below:\n\
        \n\
        {}\n\
        \n\
        This link will expire in 1 hour.\n\
        \n\
        If you did not request this reset, please ignore this email.",
        reset_url
    );
    ("Reset your password".to_string(), body)
}

pub fn reset_success_email() -> (String, String) {
    let body = "Hello,\n\
        \n\
        Your password has been changed successfully.\n\
        \n\
        If you did not perform this change, please contact support immediately."
        .to_string();
    ("Password reset successful".to_string(), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_body_embeds_the_code() {
        let (subject, body) = verification_email("123456");
        assert_eq!(subject, "Verify your email");
        assert!(body.contains("123456"));
        assert!(body.contains("24 hours"));
    }

    #[test]
    fn welcome_body_addresses_the_user() {
        let (_, body) = welcome_email("Ann");
        assert!(body.contains("Hello Ann"));
    }

    #[test]
    fn reset_body_embeds_the_link_and_window() {
        let (subject, body) =
            password_reset_email("http://localhost:5173/reset-password/deadbeef");
        assert_eq!(subject, "Reset your password");
        assert!(body.contains("http://localhost:5173/reset-password/deadbeef"));
        assert!(body.contains("1 hour"));
    }

    #[test]
    fn reset_success_confirms_the_change() {
        let (subject, body) = reset_success_email();
        assert_eq!(subject, "Password reset successful");
        assert!(body.contains("changed successfully"));
    }
}
