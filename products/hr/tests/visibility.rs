mod common;

use common::HrTestContext;
use platform_authz::{Identity, Role};
use products_hr::{HrError, ListParams, NewEmployee};
use uuid::Uuid;

#[tokio::test]
async fn employee_lists_only_themselves() {
    let ctx = HrTestContext::new_seeded().await;
    let me = ctx.staff();
    let rows = ctx
        .hr
        .employees()
        .list(&me, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, me.employee_id);
    assert_eq!(rows[0].department.as_ref().unwrap().name, "Engineering");
}

#[tokio::test]
async fn manager_lists_exactly_their_department() {
    let ctx = HrTestContext::new_seeded().await;
    let engineering = ctx.department_id("Engineering");
    ctx.manager_of("hr_lead", "HR").await;

    let staff = ctx
        .hr
        .employees()
        .list(&ctx.manager(), &ListParams::default())
        .await
        .unwrap();
    let usernames: Vec<_> = staff.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(usernames, vec!["employee", "manager"]);
    assert!(
        staff
            .iter()
            .all(|e| e.department.as_ref().map(|d| d.id) == Some(engineering))
    );

    let projects = ctx
        .hr
        .projects()
        .list(&ctx.manager(), &ListParams::default())
        .await
        .unwrap();
    let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["ERP Core", "Mobile App"]);
    assert!(projects.iter().all(|p| p.department == Some(engineering)));
}

#[tokio::test]
async fn admin_sees_every_row() {
    let ctx = HrTestContext::new_seeded().await;
    let admin = ctx.admin();
    let params = ListParams::default();
    assert_eq!(ctx.hr.departments().list(&admin, &params).await.unwrap().len(), 3);
    assert_eq!(ctx.hr.employees().list(&admin, &params).await.unwrap().len(), 3);
    assert_eq!(ctx.hr.projects().list(&admin, &params).await.unwrap().len(), 3);
}

#[tokio::test]
async fn employee_sees_member_projects_and_own_department() {
    let ctx = HrTestContext::new_seeded().await;
    let me = ctx.staff();
    let projects = ctx
        .hr
        .projects()
        .list(&me, &ListParams::default())
        .await
        .unwrap();
    let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["ERP Core", "Mobile App"]);
    assert!(projects.iter().all(|p| p.employees.contains(&me.employee_id)));

    let manager = ctx.manager();
    let managed = ctx
        .hr
        .projects()
        .list(&manager, &ListParams::default())
        .await
        .unwrap();
    let erp = managed.iter().find(|p| p.name == "ERP Core").unwrap();
    assert_eq!(erp.employees.len(), 2);

    let departments = ctx
        .hr
        .departments()
        .list(&me, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0].name, "Engineering");
}

#[tokio::test]
async fn out_of_scope_retrieve_is_not_found() {
    let ctx = HrTestContext::new_seeded().await;
    let hr_project = ctx.project_id("Recruitment Drive");
    let err = ctx
        .hr
        .projects()
        .retrieve(&ctx.manager(), hr_project)
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::NotFound));

    let err = ctx
        .hr
        .employees()
        .retrieve(&ctx.staff(), ctx.manager().employee_id)
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::NotFound));

    let err = ctx
        .hr
        .departments()
        .retrieve(&ctx.admin(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::NotFound));
}

#[tokio::test]
async fn unaffiliated_manager_sees_nothing() {
    let ctx = HrTestContext::new_seeded().await;
    let drifter = ctx
        .hr
        .employees()
        .create(
            &ctx.admin(),
            NewEmployee {
                username: "drifter".into(),
                role: Some(Role::Manager),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let who = Identity::new(drifter.id, Role::Manager, None);
    let params = ListParams::default();
    assert!(ctx.hr.employees().list(&who, &params).await.unwrap().is_empty());
    assert!(ctx.hr.projects().list(&who, &params).await.unwrap().is_empty());
    assert!(ctx.hr.departments().list(&who, &params).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_and_ordering_apply_within_scope() {
    let ctx = HrTestContext::new_seeded().await;
    let admin = ctx.admin();

    let found = ctx
        .hr
        .employees()
        .list(&admin, &ListParams::search("MANNY"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "manager");

    let by_salary = ctx
        .hr
        .employees()
        .list(&admin, &ListParams::ordering("-salary"))
        .await
        .unwrap();
    let usernames: Vec<_> = by_salary.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(usernames, vec!["manager", "employee", "admin"]);

    let described = ctx
        .hr
        .projects()
        .list(&admin, &ListParams::search("android"))
        .await
        .unwrap();
    assert_eq!(described.len(), 1);
    assert_eq!(described[0].name, "Mobile App");

    let hidden = ctx
        .hr
        .projects()
        .list(&ctx.manager(), &ListParams::search("Recruitment"))
        .await
        .unwrap();
    assert!(hidden.is_empty());

    let err = ctx
        .hr
        .departments()
        .list(&admin, &ListParams::ordering("secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::Validation(_)));
}

#[tokio::test]
async fn pagination_windows_the_ordered_rows() {
    let ctx = HrTestContext::new_seeded().await;
    let params = ListParams {
        limit: Some(1),
        offset: Some(1),
        ..ListParams::default()
    };
    let page = ctx
        .hr
        .departments()
        .list(&ctx.admin(), &params)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "HR");
}

#[tokio::test]
async fn default_list_returns_every_visible_row() {
    let ctx = HrTestContext::new_seeded().await;
    let admin = ctx.admin();
    for n in 0..60 {
        ctx.hr
            .employees()
            .create(
                &admin,
                NewEmployee {
                    username: format!("temp{n:02}"),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let everyone = ctx
        .hr
        .employees()
        .list(&admin, &ListParams::default())
        .await
        .unwrap();
    assert_eq!(everyone.len(), 63);

    let capped = ListParams {
        limit: Some(10),
        ..ListParams::default()
    };
    let page = ctx.hr.employees().list(&admin, &capped).await.unwrap();
    assert_eq!(page.len(), 10);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let ctx = HrTestContext::new_seeded().await;
    let admin = ctx.admin();
    for term in ["_", "%"] {
        let rows = ctx
            .hr
            .employees()
            .list(&admin, &ListParams::search(term))
            .await
            .unwrap();
        assert!(rows.is_empty(), "'{term}' matched {} rows", rows.len());
    }

    ctx.hr
        .employees()
        .create(
            &admin,
            NewEmployee {
                username: "qa_lead".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let rows = ctx
        .hr
        .employees()
        .list(&admin, &ListParams::search("_"))
        .await
        .unwrap();
    let usernames: Vec<_> = rows.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(usernames, vec!["qa_lead"]);
}
