pub mod identity_service;
pub mod catalog_service;
pub mod cart_service;
pub mod order_service;
pub mod pickup_service;
pub mod notifier;

/// Identifiant de ligne (uuid v4 en texte)
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Motif LIKE "contient": `%`, `_` et `\` de l'entrée sont littéraux
pub(crate) fn contains_pattern(needle: &str) -> sea_orm::sea_query::LikeExpr {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');

    sea_orm::sea_query::LikeExpr::new(escaped).escape('\\')
}

