#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Root,
    Login,
    Register,
    Chat,
    Profile,
}

impl Page {
    pub fn path(self) -> &'static str {
        match self {
            Page::Root => "/",
            Page::Login => "/login",
            Page::Register => "/register",
            Page::Chat => "/chat",
            Page::Profile => "/profile",
        }
    }

    pub fn is_protected(self) -> bool {
        matches!(self, Page::Chat | Page::Profile)
    }

    /// Where to send the user instead of rendering this page, if anywhere.
    pub fn redirect(self, signed_in: bool) -> Option<Page> {
        match (self, signed_in) {
            (Page::Root, true) => Some(Page::Chat),
            (Page::Root, false) => Some(Page::Login),
            (Page::Login | Page::Register, true) => Some(Page::Chat),
            (page, false) if page.is_protected() => Some(Page::Login),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::LOGIN_PATH;

    #[test]
    fn login_page_matches_expiry_redirect() {
        assert_eq!(Page::Login.path(), LOGIN_PATH);
    }

    #[test]
    fn protected_pages_need_a_token() {
        assert_eq!(Page::Chat.redirect(false), Some(Page::Login));
        assert_eq!(Page::Profile.redirect(false), Some(Page::Login));
        assert_eq!(Page::Chat.redirect(true), None);
        assert_eq!(Page::Profile.redirect(true), None);
    }

    #[test]
    fn public_pages_bounce_signed_in_users() {
        assert_eq!(Page::Login.redirect(true), Some(Page::Chat));
        assert_eq!(Page::Register.redirect(true), Some(Page::Chat));
        assert_eq!(Page::Login.redirect(false), None);
        assert_eq!(Page::Register.redirect(false), None);
    }

    #[test]
    fn root_routes_by_token() {
        assert_eq!(Page::Root.redirect(true), Some(Page::Chat));
        assert_eq!(Page::Root.redirect(false), Some(Page::Login));
    }
}
