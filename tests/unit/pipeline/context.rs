use super::*;

#[test]
fn each_request_gets_its_own_job_scope() {
    let a = RequestContext::new("123");
    let b = RequestContext::new("123");
    assert_ne!(a.job_id, b.job_id);
    assert_eq!(a.job_id.len(), 32);
    assert!(a.job_id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(a.scope, OverlayScope::new("123", a.job_id.clone()));
    assert_ne!(a.scope.prefix(), b.scope.prefix());
}

#[test]
fn explicit_job_ids_are_kept() {
    let ctx = RequestContext::with_job_id("9", "fixed");
    assert_eq!(ctx.scope.file_name(0, "svg"), "overlay_9_fixed_000000.svg");
    assert!(!ctx.cancel.is_cancelled());
}
