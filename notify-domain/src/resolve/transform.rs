use crate::{
    error::DomainResult as Result,
    model::{Context, DispatchOptions, Entity, Message, Subscribers},
};
use async_trait::async_trait;

/// 变换所见的本次解析语境
#[derive(Debug, Clone, Copy)]
pub struct ResolutionScope<'a> {
    pub entity: &'a Entity,
    pub message: &'a Message,
    pub options: &'a DispatchOptions,
    pub context: &'a Context,
}

/// 解析后置变换：在默认渠道合并之后按注册顺序执行
#[async_trait]
pub trait PostResolutionTransform: Send + Sync {
    fn transform_name(&self) -> &str;

    async fn transform(
        &self,
        subscribers: Subscribers,
        scope: &ResolutionScope<'_>,
    ) -> Result<Subscribers>;
}
