use axum::Router;

pub fn create_test_app() -> Router {
    std::env::set_var("DEMO_SEED", "42");
    carimpact_backend::create_app()
}
