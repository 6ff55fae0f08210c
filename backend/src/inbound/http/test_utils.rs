//! Test helpers for inbound HTTP components.

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::test::TestRequest;
use actix_web::{App, web};

use crate::Trace;
use crate::domain::{UserId, UserRole};
use crate::inbound::http::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::{certificates, progress};

/// Build an app exposing every API handler under `/api/v1` over `state`.
///
/// The trace middleware is installed so error bodies carry a trace id the
/// same way they do in production.
pub fn api_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(Trace)
        .service(
            web::scope("/api/v1")
                .service(progress::complete_lesson)
                .service(progress::get_course_progress)
                .service(progress::reset_course_progress)
                .service(certificates::list_certificates)
                .service(certificates::verify_certificate)
                .service(certificates::issue_certificate)
                .service(certificates::regenerate_certificate),
        )
}

/// Attach gateway identity headers for `user_id` acting as `role`.
pub fn as_user(request: TestRequest, user_id: UserId, role: UserRole) -> TestRequest {
    request
        .insert_header((USER_ID_HEADER, user_id.to_string()))
        .insert_header((USER_ROLE_HEADER, role.as_str()))
}
