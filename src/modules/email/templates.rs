use crate::modules::auth::otp::{ChallengePurpose, OTP_TTL_MINUTES};

/// Function to pick the subject line for a challenge purpose
pub fn challenge_subject(purpose: ChallengePurpose) -> &'static str {
    match purpose {
        ChallengePurpose::Registration => "Your Registration OTP Code",
        ChallengePurpose::Login => "Your Login OTP Code",
        ChallengePurpose::PasswordReset => "Password Reset OTP Code",
    }
}

/// Function to render the plain-text body carrying a one-time code
pub fn challenge_body(purpose: ChallengePurpose, code: &str) -> String {
    let lead = match purpose {
        ChallengePurpose::Registration => {
            "Welcome to Two-To-Enter!\n\nUse the following code to verify your account:"
        }
        ChallengePurpose::Login => "Use the following code to finish signing in:",
        ChallengePurpose::PasswordReset => {
            "A password reset was requested for your account.\n\n\
            Use the following code to continue:"
        }
    };

    format!(
        "{}\n\
        \n\
        {}\n\
        \n\
        This code will expire in {} minutes.\n\
        \n\
        If you did not request this code, please ignore this message and ensure \
        your account is secure.\n\
        \n\
        Best regards,\n\
        The Two-To-Enter Team",
        lead, code, OTP_TTL_MINUTES
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects_match_purpose() {
        assert_eq!(
            challenge_subject(ChallengePurpose::Registration),
            "Your Registration OTP Code"
        );
        assert_eq!(challenge_subject(ChallengePurpose::Login), "Your Login OTP Code");
        assert_eq!(
            challenge_subject(ChallengePurpose::PasswordReset),
            "Password Reset OTP Code"
        );
    }

    #[test]
    fn test_body_carries_code_and_validity() {
        for purpose in [
            ChallengePurpose::Registration,
            ChallengePurpose::Login,
            ChallengePurpose::PasswordReset,
        ] {
            let body = challenge_body(purpose, "042137");
            assert!(body.contains("042137"));
            assert!(body.contains("expire in 10 minutes"));
        }
    }
}
