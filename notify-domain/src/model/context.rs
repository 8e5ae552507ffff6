use super::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 事件上下文：实体类型 → 相关实体 ID 集合
///
/// 仅表达成员关系，插入顺序无意义。每次顶层投递推导一次，随队列任务原样传递。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    entries: BTreeMap<String, BTreeSet<EntityId>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有类型下均无实体时视为空
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeSet::is_empty)
    }

    /// 返回是否为新增
    pub fn insert(&mut self, entity_type: &str, id: EntityId) -> bool {
        self.entries
            .entry(entity_type.to_string())
            .or_default()
            .insert(id)
    }

    pub fn extend<I>(&mut self, entity_type: &str, ids: I)
    where
        I: IntoIterator<Item = EntityId>,
    {
        self.entries
            .entry(entity_type.to_string())
            .or_default()
            .extend(ids);
    }

    pub fn contains(&self, entity_type: &str, id: EntityId) -> bool {
        self.entries
            .get(entity_type)
            .is_some_and(|ids| ids.contains(&id))
    }

    pub fn ids(&self, entity_type: &str) -> Option<&BTreeSet<EntityId>> {
        self.entries.get(entity_type)
    }

    /// 按类型名遍历，跳过空集合
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<EntityId>)> {
        self.entries
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(ty, ids)| (ty.as_str(), ids))
    }
}

impl<S: Into<String>, I: IntoIterator<Item = EntityId>> FromIterator<(S, I)> for Context {
    fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
        let mut context = Context::new();
        for (ty, ids) in iter {
            context.extend(&ty.into(), ids);
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_semantics_and_emptiness() {
        let mut ctx = Context::new();
        assert!(ctx.is_empty());

        assert!(ctx.insert("node", 1));
        assert!(!ctx.insert("node", 1));
        ctx.extend("user", [3, 2, 3]);
        ctx.extend("taxonomy_term", []);

        assert!(!ctx.is_empty());
        assert!(ctx.contains("user", 2));
        assert_eq!(ctx.ids("user").map(BTreeSet::len), Some(2));
        // 空集合不参与遍历
        let types: Vec<&str> = ctx.iter().map(|(ty, _)| ty).collect();
        assert_eq!(types, vec!["node", "user"]);
    }

    #[test]
    fn only_empty_facets_is_still_empty() {
        let ctx: Context = [("node", Vec::<EntityId>::new())].into_iter().collect();
        assert!(ctx.is_empty());
    }

    #[test]
    fn serializes_as_plain_map() {
        let ctx: Context = [("node", vec![1]), ("user", vec![7, 5])].into_iter().collect();
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json, serde_json::json!({"node": [1], "user": [5, 7]}));
    }
}
