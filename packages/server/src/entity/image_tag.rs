use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "image_tag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub description: String,

    #[sea_orm(indexed)]
    pub gallery_image_id: i32,
    #[sea_orm(belongs_to, from = "gallery_image_id", to = "id")]
    pub gallery_image: HasOne<super::gallery_image::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
