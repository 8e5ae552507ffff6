//! 上下文扩充器（ContextAugmenter）
//!
//! 每种“一跳”关系对应一个扩充器，按注册顺序执行：
//! - `OwnerAugmenter`：事件实体的作者与所属容器；
//! - `ContainerAugmenter`：上下文中各容器实体的作者与分类词条；
//! - `GroupAugmenter`：上下文中各容器实体所属的分组（需要分组子系统）。
//!
use crate::{
    error::DomainResult as Result,
    model::{Context, Entity},
    ports::{EntityLoader, GroupMembership},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

#[async_trait]
pub trait ContextAugmenter: Send + Sync {
    /// 扩充器名称（用于日志）
    fn augmenter_name(&self) -> &str;

    async fn augment(&self, entity: &Entity, context: &mut Context) -> Result<()>;
}

pub struct OwnerAugmenter {
    user_type: String,
}

impl OwnerAugmenter {
    pub fn new(user_type: impl Into<String>) -> Self {
        Self {
            user_type: user_type.into(),
        }
    }
}

#[async_trait]
impl ContextAugmenter for OwnerAugmenter {
    fn augmenter_name(&self) -> &str {
        "owner"
    }

    async fn augment(&self, entity: &Entity, context: &mut Context) -> Result<()> {
        if let Some(owner) = entity.owner() {
            context.insert(&self.user_type, owner);
        }
        if let Some(parent) = entity.parent() {
            context.insert(&parent.entity_type, parent.id);
        }
        Ok(())
    }
}

pub struct ContainerAugmenter {
    loader: Arc<dyn EntityLoader>,
    container_type: String,
    user_type: String,
    category_type: String,
}

impl ContainerAugmenter {
    pub fn new(
        loader: Arc<dyn EntityLoader>,
        container_type: impl Into<String>,
        user_type: impl Into<String>,
        category_type: impl Into<String>,
    ) -> Self {
        Self {
            loader,
            container_type: container_type.into(),
            user_type: user_type.into(),
            category_type: category_type.into(),
        }
    }
}

#[async_trait]
impl ContextAugmenter for ContainerAugmenter {
    fn augmenter_name(&self) -> &str {
        "container"
    }

    async fn augment(&self, entity: &Entity, context: &mut Context) -> Result<()> {
        let Some(ids) = context.ids(&self.container_type).cloned() else {
            return Ok(());
        };

        for id in ids {
            let loaded;
            let container = if entity.is(&self.container_type, id) {
                entity
            } else {
                match self.loader.load(&self.container_type, id).await? {
                    Some(found) => {
                        loaded = found;
                        &loaded
                    }
                    None => {
                        trace!(container = id, "container not found, skipped");
                        continue;
                    }
                }
            };

            if let Some(owner) = container.owner() {
                context.insert(&self.user_type, owner);
            }
            context.extend(&self.category_type, container.category_ids());
        }
        Ok(())
    }
}

pub struct GroupAugmenter {
    groups: Arc<dyn GroupMembership>,
    container_type: String,
}

impl GroupAugmenter {
    pub fn new(groups: Arc<dyn GroupMembership>, container_type: impl Into<String>) -> Self {
        Self {
            groups,
            container_type: container_type.into(),
        }
    }
}

#[async_trait]
impl ContextAugmenter for GroupAugmenter {
    fn augmenter_name(&self) -> &str {
        "group"
    }

    async fn augment(&self, _entity: &Entity, context: &mut Context) -> Result<()> {
        let Some(ids) = context.ids(&self.container_type).cloned() else {
            return Ok(());
        };

        for id in ids {
            for group in self.groups.groups_of(&self.container_type, id).await? {
                context.insert(&group.entity_type, group.id);
            }
        }
        Ok(())
    }
}
