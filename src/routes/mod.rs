//! Route tables for the admin, student, dev console, and login applications
//!
//! Each application is a static table of patterns. A pattern segment starting
//! with `:` captures a parameter and a trailing `*` matches any remainder.
//! [`resolve_app`] is the top-level router: it picks the application from the
//! path prefix, applies the role gate, and resolves inside that table.

use std::collections::BTreeMap;
use std::fmt;

use crate::auth::User;
use crate::tenant::TenantRegistry;

/// Default login page
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppKind {
    Admin,
    Student,
    DevConsole,
    Auth,
}

impl AppKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "student" => Some(Self::Student),
            "dev" | "dev-console" | "devconsole" => Some(Self::DevConsole),
            "auth" | "login" => Some(Self::Auth),
            _ => None,
        }
    }

    /// Path prefix the application is mounted under
    pub fn base(&self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Student => "/student",
            Self::DevConsole => "/dev",
            Self::Auth => LOGIN_PATH,
        }
    }

    pub fn table(&self) -> &'static RouteTable {
        match self {
            Self::Admin => &ADMIN_ROUTES,
            Self::Student => &STUDENT_ROUTES,
            Self::DevConsole => &DEV_ROUTES,
            Self::Auth => &AUTH_ROUTES,
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "admin",
            Self::Student => "student",
            Self::DevConsole => "dev",
            Self::Auth => "auth",
        })
    }
}

/// Who may enter an application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Anyone, signed in or not
    Public,
    /// Any signed-in user with a learner role
    Learner,
    /// Operator role or staff flag
    Operator,
    /// Platform staff only
    Staff,
}

impl RoleRequirement {
    pub fn allows(&self, user: Option<&User>) -> bool {
        let Some(user) = user else {
            return matches!(self, Self::Public);
        };
        let role = user.tenant_role;
        match self {
            Self::Public => true,
            Self::Learner => role.is_some_and(|r| r.is_learner()),
            Self::Operator => user.is_staff || role.is_some_and(|r| r.is_operator()),
            Self::Staff => user.is_staff || user.is_superuser,
        }
    }
}

pub fn required_role(app: AppKind) -> RoleRequirement {
    match app {
        AppKind::Admin => RoleRequirement::Operator,
        AppKind::Student => RoleRequirement::Learner,
        AppKind::DevConsole => RoleRequirement::Staff,
        AppKind::Auth => RoleRequirement::Public,
    }
}

/// Rendered screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    // Auth
    LoginHakwonPlus,
    LoginTenant,
    LoginCustom,

    // Admin
    AdminDashboard,
    StudentsHome,
    StudentDetail,
    Lectures,
    LectureDetail,
    LectureMaterials,
    LectureBoard,
    LectureDdays,
    LectureAttendance,
    LectureReport,
    LectureSessions,
    SessionAttendance,
    SessionScores,
    SessionExams,
    SessionAssignments,
    SessionVideos,
    SessionVideoDetail,
    Materials,
    Clinic,
    Counsel,
    Notice,
    Message,
    CommunityNotice,
    CommunityQna,
    CommunityReview,
    Staff,
    Settings,
    ProfileAccount,
    ProfileAttendance,
    ProfileExpense,

    // Student
    StudentDashboard,
    VideoHome,
    VideoPublicCourses,
    VideoCourse,
    VideoSession,
    VideoPlay,
    Sessions,
    SessionDetail,
    Submit,
    SubmitScore,
    SubmitAssignment,
    Exams,
    ExamDetail,
    ExamSubmit,
    ExamResult,
    Grades,
    More,
    Profile,
    Qna,
    Notices,
    NoticeDetail,
    Notifications,
    IdCard,
    StudentClinic,
    StudentAttendance,

    // Dev console
    TenantList,
    TenantDetail,
    TenantBranding,
    TenantDomains,
    TenantAdvanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Page(Page),
    /// Redirect relative to the application base, or absolute when it starts with `/`
    Redirect(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct RouteDef {
    pub pattern: &'static str,
    pub target: Target,
}

const fn page(pattern: &'static str, page: Page) -> RouteDef {
    RouteDef {
        pattern,
        target: Target::Page(page),
    }
}

const fn redirect(pattern: &'static str, to: &'static str) -> RouteDef {
    RouteDef {
        pattern,
        target: Target::Redirect(to),
    }
}

/// Matched page with captured parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub app: AppKind,
    pub page: Page,
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Numeric parameter such as `examId`
    pub fn id_param(&self, name: &str) -> Option<u64> {
        self.param(name)?.parse().ok().filter(|id| *id > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render(RouteMatch),
    Redirect(String),
}

/// Static route table of one application
#[derive(Debug)]
pub struct RouteTable {
    pub app: AppKind,
    pub routes: &'static [RouteDef],
    /// Where unmatched paths go
    pub fallback: &'static str,
}

impl RouteTable {
    /// Resolve a path below the application base (`"exams/3"` or `"/student/exams/3"`)
    pub fn resolve(&self, path: &str) -> Resolution {
        let relative = strip_base(path, self.app.base());
        let segments = split(relative);

        for route in self.routes {
            if let Some(params) = match_pattern(route.pattern, &segments) {
                return match route.target {
                    Target::Page(page) => Resolution::Render(RouteMatch {
                        app: self.app,
                        page,
                        params,
                    }),
                    Target::Redirect(to) => Resolution::Redirect(self.absolute(to)),
                };
            }
        }

        tracing::debug!(app = %self.app, path, "No route matched, using fallback");
        Resolution::Redirect(self.fallback.to_string())
    }

    fn absolute(&self, to: &str) -> String {
        if to.starts_with('/') {
            to.to_string()
        } else {
            format!("{}/{to}", self.app.base())
        }
    }
}

fn strip_base<'a>(path: &'a str, base: &str) -> &'a str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.strip_prefix(base) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_pattern(pattern: &str, segments: &[&str]) -> Option<BTreeMap<String, String>> {
    let parts = split(pattern);
    let mut params = BTreeMap::new();

    for (index, part) in parts.iter().enumerate() {
        if *part == "*" {
            params.insert("*".to_string(), segments.get(index..)?.join("/"));
            return Some(params);
        }
        let segment = segments.get(index)?;
        if let Some(name) = part.strip_prefix(':') {
            params.insert(name.to_string(), (*segment).to_string());
        } else if part != segment {
            return None;
        }
    }

    (parts.len() == segments.len()).then_some(params)
}

// ============================================================================
// Tables
// ============================================================================

pub static ADMIN_ROUTES: RouteTable = RouteTable {
    app: AppKind::Admin,
    routes: &[
        redirect("", "dashboard"),
        page("dashboard", Page::AdminDashboard),
        redirect("students", "students/home"),
        page("students/home", Page::StudentsHome),
        page("students/:studentId", Page::StudentDetail),
        page("lectures", Page::Lectures),
        page("lectures/:lectureId", Page::LectureDetail),
        page("lectures/:lectureId/materials", Page::LectureMaterials),
        page("lectures/:lectureId/board", Page::LectureBoard),
        page("lectures/:lectureId/ddays", Page::LectureDdays),
        page("lectures/:lectureId/attendance", Page::LectureAttendance),
        page("lectures/:lectureId/report", Page::LectureReport),
        page("lectures/:lectureId/sessions", Page::LectureSessions),
        page("lectures/:lectureId/sessions/:sessionId", Page::SessionAttendance),
        page("lectures/:lectureId/sessions/:sessionId/attendance", Page::SessionAttendance),
        page("lectures/:lectureId/sessions/:sessionId/scores", Page::SessionScores),
        page("lectures/:lectureId/sessions/:sessionId/exams", Page::SessionExams),
        page("lectures/:lectureId/sessions/:sessionId/assignments", Page::SessionAssignments),
        page("lectures/:lectureId/sessions/:sessionId/videos", Page::SessionVideos),
        page("lectures/:lectureId/sessions/:sessionId/videos/:videoId", Page::SessionVideoDetail),
        page("materials/*", Page::Materials),
        page("clinic/*", Page::Clinic),
        page("counsel", Page::Counsel),
        page("notice", Page::Notice),
        page("message", Page::Message),
        redirect("community", "community/notice"),
        page("community/notice", Page::CommunityNotice),
        page("community/qna", Page::CommunityQna),
        page("community/review", Page::CommunityReview),
        page("staff/*", Page::Staff),
        page("settings", Page::Settings),
        redirect("profile", "profile/account"),
        page("profile/account", Page::ProfileAccount),
        page("profile/attendance", Page::ProfileAttendance),
        page("profile/expense", Page::ProfileExpense),
    ],
    fallback: "/admin",
};

pub static STUDENT_ROUTES: RouteTable = RouteTable {
    app: AppKind::Student,
    routes: &[
        redirect("", "/student/dashboard"),
        page("dashboard", Page::StudentDashboard),
        page("video", Page::VideoHome),
        page("video/courses/public", Page::VideoPublicCourses),
        page("video/courses/:lectureId", Page::VideoCourse),
        page("video/sessions/:sessionId", Page::VideoSession),
        page("video/play", Page::VideoPlay),
        page("sessions", Page::Sessions),
        page("sessions/:sessionId", Page::SessionDetail),
        page("submit", Page::Submit),
        page("submit/score", Page::SubmitScore),
        page("submit/assignment", Page::SubmitAssignment),
        page("exams", Page::Exams),
        page("exams/:examId", Page::ExamDetail),
        page("exams/:examId/submit", Page::ExamSubmit),
        page("exams/:examId/result", Page::ExamResult),
        page("grades", Page::Grades),
        page("more", Page::More),
        page("profile", Page::Profile),
        page("qna", Page::Qna),
        page("notices", Page::Notices),
        page("notices/:id", Page::NoticeDetail),
        page("notifications", Page::Notifications),
        page("idcard", Page::IdCard),
        page("clinic", Page::StudentClinic),
        page("attendance", Page::StudentAttendance),
    ],
    fallback: "/student",
};

pub static DEV_ROUTES: RouteTable = RouteTable {
    app: AppKind::DevConsole,
    routes: &[
        redirect("", "tenants"),
        page("tenants", Page::TenantList),
        page("tenants/:tenantId", Page::TenantDetail),
        page("tenants/:tenantId/branding", Page::TenantBranding),
        page("tenants/:tenantId/domains", Page::TenantDomains),
        page("tenants/:tenantId/advanced", Page::TenantAdvanced),
    ],
    fallback: "/dev",
};

pub static AUTH_ROUTES: RouteTable = RouteTable {
    app: AppKind::Auth,
    routes: &[
        page("", Page::LoginHakwonPlus),
        page("hakwonplus", Page::LoginHakwonPlus),
        page("tchul", Page::LoginTenant),
        page("limglish", Page::LoginTenant),
        page("ymath", Page::LoginTenant),
        page("custom", Page::LoginCustom),
    ],
    fallback: LOGIN_PATH,
};

// ============================================================================
// Top-level router
// ============================================================================

/// Where `/` sends a user
pub fn root_redirect(user: Option<&User>) -> &'static str {
    let Some(user) = user else {
        return LOGIN_PATH;
    };
    match user.tenant_role {
        Some(role) if role.is_operator() => "/admin",
        Some(role) if role.is_learner() => "/student",
        _ if user.is_staff => "/admin",
        _ => LOGIN_PATH,
    }
}

/// Login page of a tenant, by code or hostname
pub fn login_path_for(tenant: &str) -> &'static str {
    TenantRegistry::login_path(TenantRegistry::tenant_id_for(tenant).unwrap_or_default())
}

/// Application mounted at the start of `path`
pub fn app_for_path(path: &str) -> Option<AppKind> {
    [AppKind::Admin, AppKind::Student, AppKind::DevConsole, AppKind::Auth]
        .into_iter()
        .find(|app| {
            let base = app.base();
            path == base || path.starts_with(&format!("{base}/"))
        })
}

/// Resolve an absolute path for the given user
///
/// Gated applications redirect to the login page when the user is missing
/// and to `/` when the role does not fit.
pub fn resolve_app(path: &str, user: Option<&User>) -> Resolution {
    let clean = path.split(['?', '#']).next().unwrap_or_default();
    if clean.is_empty() || clean == "/" {
        return Resolution::Redirect(root_redirect(user).to_string());
    }

    let Some(app) = app_for_path(clean) else {
        return Resolution::Redirect("/".to_string());
    };

    if !required_role(app).allows(user) {
        let to = if user.is_none() { LOGIN_PATH } else { "/" };
        tracing::debug!(app = %app, path = clean, to, "Route gate denied");
        return Resolution::Redirect(to.to_string());
    }

    app.table().resolve(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TenantRole;

    fn user(role: Option<TenantRole>, is_staff: bool) -> User {
        User {
            id: 1,
            username: "u".to_string(),
            email: None,
            is_staff,
            is_superuser: false,
            tenant_role: role,
        }
    }

    fn rendered(resolution: Resolution) -> RouteMatch {
        match resolution {
            Resolution::Render(m) => m,
            Resolution::Redirect(to) => panic!("expected a page, got redirect to {to}"),
        }
    }

    #[test]
    fn test_student_params() {
        let m = rendered(STUDENT_ROUTES.resolve("/student/exams/42/result"));
        assert_eq!(m.page, Page::ExamResult);
        assert_eq!(m.id_param("examId"), Some(42));
    }

    #[test]
    fn test_student_fallback_and_index() {
        assert_eq!(
            STUDENT_ROUTES.resolve("/student/nope/deeper"),
            Resolution::Redirect("/student".to_string())
        );
        assert_eq!(
            STUDENT_ROUTES.resolve("/student"),
            Resolution::Redirect("/student/dashboard".to_string())
        );
    }

    #[test]
    fn test_admin_wildcard_and_relative_redirect() {
        let m = rendered(ADMIN_ROUTES.resolve("/admin/clinic/bookings/3"));
        assert_eq!(m.page, Page::Clinic);
        assert_eq!(m.param("*"), Some("bookings/3"));
        assert_eq!(
            ADMIN_ROUTES.resolve("/admin/profile"),
            Resolution::Redirect("/admin/profile/account".to_string())
        );
        let video = rendered(ADMIN_ROUTES.resolve("lectures/1/sessions/2/videos/3"));
        assert_eq!(video.page, Page::SessionVideoDetail);
        assert_eq!(video.id_param("videoId"), Some(3));
    }

    #[test]
    fn test_root_redirect_by_role() {
        assert_eq!(root_redirect(None), "/login");
        assert_eq!(root_redirect(Some(&user(Some(TenantRole::Teacher), false))), "/admin");
        assert_eq!(root_redirect(Some(&user(Some(TenantRole::Parent), false))), "/student");
        assert_eq!(root_redirect(Some(&user(None, false))), "/login");
    }

    #[test]
    fn test_gates() {
        let student = user(Some(TenantRole::Student), false);
        assert_eq!(
            resolve_app("/admin/dashboard", Some(&student)),
            Resolution::Redirect("/".to_string())
        );
        assert_eq!(
            resolve_app("/student/exams", None),
            Resolution::Redirect("/login".to_string())
        );
        assert_eq!(
            rendered(resolve_app("/student/exams", Some(&student))).page,
            Page::Exams
        );
        assert_eq!(
            resolve_app("/elsewhere", Some(&student)),
            Resolution::Redirect("/".to_string())
        );
        let owner = user(Some(TenantRole::Owner), false);
        assert_eq!(
            resolve_app("/dev/tenants", Some(&owner)),
            Resolution::Redirect("/".to_string())
        );
        assert_eq!(
            rendered(resolve_app("/dev/tenants/3", Some(&user(None, true)))).page,
            Page::TenantDetail
        );
    }

    #[test]
    fn test_login_routes_are_public() {
        assert_eq!(
            rendered(resolve_app("/login/limglish", None)).page,
            Page::LoginTenant
        );
    }
}
