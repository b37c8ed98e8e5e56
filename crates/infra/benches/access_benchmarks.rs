use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gatehouse_auth::{AccessEngine, MenuItem, MenuLink, Permission, PermissionKind, Role, UserRole};
use gatehouse_core::{TenantId, UserId};
use gatehouse_infra::{InMemoryDirectory, UserAccount};
use std::sync::Arc;
use std::time::Duration;

/// Synthetic directory: `roles` roles of `per_role` permissions each, all held
/// by one user, plus `menu_nodes` top-level nodes gated by those permissions.
fn synthetic_directory(
    roles: usize,
    per_role: usize,
    menu_nodes: usize,
) -> (Arc<InMemoryDirectory>, UserId) {
    let dir = Arc::new(InMemoryDirectory::new());
    let tenant = TenantId::new();
    let user = UserId::new();
    dir.upsert_user(UserAccount::active(user)).unwrap();

    let mut permission_ids = Vec::new();
    for r in 0..roles {
        let role = Role::new(tenant, format!("role{r}"));
        dir.upsert_role(role.clone()).unwrap();
        dir.assign(UserRole::active(user, role.id)).unwrap();
        for p in 0..per_role {
            let permission =
                Permission::page(format!("module{r}.page{p}"), format!("/module{r}/page{p}"));
            dir.upsert_permission(permission.clone()).unwrap();
            dir.grant(role.id, permission.id).unwrap();
            permission_ids.push(permission.id);
        }
    }

    // Half the nodes are gated by codes nobody holds.
    for n in 0..menu_nodes {
        let mut item = MenuItem::new(format!("node{n}"), format!("Node {n}"))
            .with_order(n as i32)
            .with_column(
                "Links",
                (0..4)
                    .map(|l| {
                        MenuLink::new(
                            format!("node{n}-{l}"),
                            format!("Link {l}"),
                            format!("/node{n}/{l}"),
                        )
                        .gated_by(format!("module0.page{l}"))
                    })
                    .collect(),
            );
        if n % 2 == 0 {
            if let Some(id) = permission_ids.get(n % permission_ids.len().max(1)) {
                item = item.gated_by(*id);
            }
        } else {
            let orphan = Permission::new(format!("orphan.node{n}"), PermissionKind::Page);
            dir.upsert_permission(orphan.clone()).unwrap();
            item = item.gated_by(orphan.id);
        }
        dir.upsert_menu_item(item).unwrap();
    }

    (dir, user)
}

fn bench_effective_permissions(c: &mut Criterion) {
    let mut group = c.benchmark_group("effective_permissions");

    for roles in [1usize, 10, 50].iter() {
        let (dir, user) = synthetic_directory(*roles, 20, 0);
        let engine = AccessEngine::from_directory(dir);
        group.throughput(Throughput::Elements((*roles * 20) as u64));
        group.bench_with_input(BenchmarkId::new("aggregate", roles), roles, |b, _| {
            b.iter(|| black_box(engine.effective_permissions(user).unwrap()));
        });
    }

    group.finish();
}

fn bench_menu_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("menu_filtering");

    for nodes in [10usize, 100, 500].iter() {
        let (dir, user) = synthetic_directory(5, 20, *nodes);
        let engine = AccessEngine::from_directory(dir);
        group.throughput(Throughput::Elements(*nodes as u64));
        group.bench_with_input(BenchmarkId::new("build_menu_for_user", nodes), nodes, |b, _| {
            b.iter(|| black_box(engine.build_menu_for_user(user).unwrap()));
        });
    }

    group.finish();
}

fn bench_route_check_cached_vs_uncached(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_check");
    group.sample_size(1000);

    let (dir, user) = synthetic_directory(10, 20, 50);
    let uncached = AccessEngine::from_directory(dir.clone());
    let cached = AccessEngine::from_directory(dir).with_permission_cache(Duration::from_secs(60));

    group.bench_function("uncached", |b| {
        b.iter(|| black_box(uncached.check_route(Some(user), "/module9/page19").unwrap()));
    });
    group.bench_function("cached", |b| {
        b.iter(|| black_box(cached.check_route(Some(user), "/module9/page19").unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_effective_permissions,
    bench_menu_filtering,
    bench_route_check_cached_vs_uncached
);
criterion_main!(benches);
