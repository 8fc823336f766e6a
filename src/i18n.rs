//! Locale selection and localized authentication messages.
//!
//! Staff use the system in Arabic and English; only authentication failures
//! carry translated text, every other error message is English.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    /// Picks the first supported language from an `Accept-Language` header,
    /// honouring q-values. Unsupported or malformed input falls back to English.
    pub fn from_accept_language(header: &str) -> Self {
        let mut best: Option<(f32, Locale)> = None;
        for part in header.split(',') {
            let mut pieces = part.trim().split(';');
            let tag = pieces.next().unwrap_or_default().trim().to_ascii_lowercase();
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q=").map(str::to_string))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);

            let locale = if tag == "ar" || tag.starts_with("ar-") {
                Locale::Ar
            } else if tag == "en" || tag.starts_with("en-") {
                Locale::En
            } else {
                continue;
            };

            if best.map_or(true, |(q, _)| quality > q) {
                best = Some((quality, locale));
            }
        }
        best.map(|(_, locale)| locale).unwrap_or_default()
    }
}

/// Authentication failure codes surfaced to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    InvalidCredentials,
    UserDisabled,
    TokenMissing,
    TokenInvalid,
    TokenExpired,
    WeakPassword,
    EmailInUse,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::UserDisabled => "user_disabled",
            Self::TokenMissing => "token_missing",
            Self::TokenInvalid => "token_invalid",
            Self::TokenExpired => "token_expired",
            Self::WeakPassword => "weak_password",
            Self::EmailInUse => "email_in_use",
        }
    }

    pub fn message(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::InvalidCredentials, Locale::En) => "Incorrect email or password",
            (Self::InvalidCredentials, Locale::Ar) => {
                "البريد الإلكتروني أو كلمة المرور غير صحيحة"
            }
            (Self::UserDisabled, Locale::En) => "This account has been disabled",
            (Self::UserDisabled, Locale::Ar) => "تم تعطيل هذا الحساب",
            (Self::TokenMissing, Locale::En) => "Sign in to continue",
            (Self::TokenMissing, Locale::Ar) => "يرجى تسجيل الدخول للمتابعة",
            (Self::TokenInvalid, Locale::En) => "Your session is invalid, sign in again",
            (Self::TokenInvalid, Locale::Ar) => "الجلسة غير صالحة، يرجى تسجيل الدخول مجددًا",
            (Self::TokenExpired, Locale::En) => "Your session has expired, sign in again",
            (Self::TokenExpired, Locale::Ar) => "انتهت صلاحية الجلسة، يرجى تسجيل الدخول مجددًا",
            (Self::WeakPassword, Locale::En) => {
                "Password must be at least 8 characters and contain letters and digits"
            }
            (Self::WeakPassword, Locale::Ar) => {
                "يجب أن تتكون كلمة المرور من 8 أحرف على الأقل وتحتوي على حروف وأرقام"
            }
            (Self::EmailInUse, Locale::En) => "This email address is already registered",
            (Self::EmailInUse, Locale::Ar) => "البريد الإلكتروني مسجل مسبقًا",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ar", Locale::Ar)]
    #[case("ar-SA,en;q=0.8", Locale::Ar)]
    #[case("en-US,ar;q=0.9", Locale::En)]
    #[case("fr-FR,ar;q=0.5,en;q=0.4", Locale::Ar)]
    #[case("de", Locale::En)]
    #[case("", Locale::En)]
    #[case("en;q=0.2, ar;q=0.7", Locale::Ar)]
    fn accept_language_selection(#[case] header: &str, #[case] expected: Locale) {
        assert_eq!(Locale::from_accept_language(header), expected);
    }

    #[test]
    fn every_code_has_both_translations() {
        let codes = [
            AuthErrorCode::InvalidCredentials,
            AuthErrorCode::UserDisabled,
            AuthErrorCode::TokenMissing,
            AuthErrorCode::TokenInvalid,
            AuthErrorCode::TokenExpired,
            AuthErrorCode::WeakPassword,
            AuthErrorCode::EmailInUse,
        ];
        for code in codes {
            assert!(!code.message(Locale::En).is_empty());
            assert_ne!(code.message(Locale::En), code.message(Locale::Ar));
        }
    }
}
