//! 上下文推导（ContextExtractor）
//!
//! 从事件实体出发构建上下文（实体类型 → 实体 ID 集合），用于限定订阅查询范围：
//! - 调用方已提供非空上下文时原样返回；
//! - 否则以事件实体本身作为种子；
//! - 未设置 `skip_context` 时，依次执行已注册的扩充器补充一跳关系。
//!
//! 这是启发式的尽力推导，不做通用的图遍历；可选子系统缺失时对应扩充器不注册即可。
//!
mod augmenter;

pub use augmenter::{ContainerAugmenter, ContextAugmenter, GroupAugmenter, OwnerAugmenter};

use crate::{
    config::NotifyConfig,
    error::DomainResult as Result,
    model::{Context, DispatchOptions, Entity},
    ports::{EntityLoader, GroupMembership},
};
use bon::Builder;
use std::sync::Arc;
use tracing::debug;

#[derive(Builder, Clone)]
pub struct ContextExtractor {
    #[builder(default)]
    augmenters: Vec<Arc<dyn ContextAugmenter>>,
}

impl ContextExtractor {
    /// 标准装配：作者 → 容器（作者、分类词条）→ 分组（若提供）
    pub fn standard(
        config: &NotifyConfig,
        loader: Arc<dyn EntityLoader>,
        groups: Option<Arc<dyn GroupMembership>>,
    ) -> Self {
        let mut augmenters: Vec<Arc<dyn ContextAugmenter>> = vec![
            Arc::new(OwnerAugmenter::new(&config.user_entity_type)),
            Arc::new(ContainerAugmenter::new(
                loader,
                &config.container_entity_type,
                &config.user_entity_type,
                &config.category_entity_type,
            )),
        ];
        if let Some(groups) = groups {
            augmenters.push(Arc::new(GroupAugmenter::new(
                groups,
                &config.container_entity_type,
            )));
        }
        Self { augmenters }
    }

    pub async fn extract(
        &self,
        entity: &Entity,
        options: &DispatchOptions,
        context: Context,
    ) -> Result<Context> {
        if !context.is_empty() {
            return Ok(context);
        }

        let mut context = context;
        context.insert(entity.entity_type(), entity.id());
        if options.skip_context {
            return Ok(context);
        }

        for augmenter in &self.augmenters {
            augmenter.augment(entity, &mut context).await?;
        }
        debug!(
            entity_type = entity.entity_type(),
            entity_id = entity.id(),
            context = ?context,
            "context derived"
        );
        Ok(context)
    }
}
