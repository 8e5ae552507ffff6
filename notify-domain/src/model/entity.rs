use super::{EntityId, UserId};
use bon::Builder;
use serde::{Deserialize, Serialize};

/// 实体引用：类型 + ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: EntityId) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }
}

/// 字段的声明类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// 分类词条引用（单值或多值）
    CategoryReference,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityField {
    pub name: String,
    pub kind: FieldKind,
    /// 引用的实体 ID；非引用字段为空
    pub values: Vec<EntityId>,
}

impl EntityField {
    pub fn category(name: impl Into<String>, values: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::CategoryReference,
            values: values.into_iter().collect(),
        }
    }
}

/// 事件所挂载的内容实体（由外部加载，本子系统只读）
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct Entity {
    #[builder(into)]
    entity_type: String,
    id: EntityId,
    /// 实体作者
    owner: Option<UserId>,
    /// 所属容器（如评论所属的文档）
    parent: Option<EntityRef>,
    #[builder(default)]
    fields: Vec<EntityField>,
}

impl Entity {
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn parent(&self) -> Option<&EntityRef> {
        self.parent.as_ref()
    }

    pub fn to_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.id)
    }

    pub fn is(&self, entity_type: &str, id: EntityId) -> bool {
        self.entity_type == entity_type && self.id == id
    }

    /// 所有分类引用字段中的词条 ID
    pub fn category_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::CategoryReference)
            .flat_map(|f| f.values.iter().copied())
    }
}
