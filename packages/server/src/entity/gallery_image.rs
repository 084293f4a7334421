use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gallery_image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub url: String,

    #[sea_orm(indexed)]
    pub created: DateTimeUtc,

    #[sea_orm(has_many)]
    pub tags: HasMany<super::image_tag::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
