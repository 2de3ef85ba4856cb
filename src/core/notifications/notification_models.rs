// Notification events - what happened, not how it gets delivered.
//
// Moderation services emit these after a transition has been committed. The
// delivery worker turns them into WhatsApp text.

use crate::core::marketplace::{Category, Money, SaleType};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    NewRegistration {
        user_name: String,
    },
    OfferPending {
        title: String,
        owner_name: String,
        category: Category,
        neighborhood: String,
    },
    OfferApproved {
        owner_name: String,
        title: String,
    },
    OfferRejected {
        owner_name: String,
        title: String,
    },
    SaleReported {
        seller_name: String,
        offer_title: String,
        sale_type: SaleType,
        amount: Money,
    },
    ReviewSubmitted {
        offer_title: String,
        author_name: String,
        rating: u8,
    },
    /// The author already reviewed this offer `previous_count` times.
    RepeatReview {
        offer_title: String,
        author_name: String,
        rating: u8,
        evaluation_number: u32,
        previous_count: u64,
    },
    DisputeOpened {
        title: String,
        complainant_name: String,
        defendant_name: String,
    },
    SellerInterest {
        seller_name: String,
        offer_title: String,
        buyer_name: String,
    },
}

impl Notification {
    /// Short stable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::NewRegistration { .. } => "new_registration",
            Notification::OfferPending { .. } => "offer_pending",
            Notification::OfferApproved { .. } => "offer_approved",
            Notification::OfferRejected { .. } => "offer_rejected",
            Notification::SaleReported { .. } => "sale_reported",
            Notification::ReviewSubmitted { .. } => "review_submitted",
            Notification::RepeatReview { .. } => "repeat_review",
            Notification::DisputeOpened { .. } => "dispute_opened",
            Notification::SellerInterest { .. } => "seller_interest",
        }
    }

    /// Render the WhatsApp message body. `*text*` is WhatsApp bold.
    pub fn render(&self, currency_symbol: &str) -> String {
        match self {
            Notification::NewRegistration { user_name } => format!(
                "👤 *New user registered*\n\n*{}* just signed up.\n\nOpen the admin dashboard to review pending profiles.",
                user_name
            ),
            Notification::OfferPending {
                title,
                owner_name,
                category,
                neighborhood,
            } => {
                let neighborhood = if neighborhood.trim().is_empty() {
                    "Not informed"
                } else {
                    neighborhood.as_str()
                };
                format!(
                    "📦 *New offer awaiting approval*\n\n*{}* created a new offer:\n\n*Title:* {}\n*Category:* {}\n*Neighborhood:* {}\n\nOpen the admin dashboard to review and publish it.",
                    owner_name, title, category, neighborhood
                )
            }
            Notification::OfferApproved { owner_name, title } => format!(
                "✅ *Offer approved!*\n\nHi {}!\n\nYour offer \"{}\" was approved and is now visible on the platform.\n\nGood sales! 🎉",
                owner_name, title
            ),
            Notification::OfferRejected { owner_name, title } => format!(
                "❌ *Offer not approved*\n\nHi {}.\n\nUnfortunately your offer \"{}\" was not approved.\n\nPlease contact an administrator for details.",
                owner_name, title
            ),
            Notification::SaleReported {
                seller_name,
                offer_title,
                sale_type,
                amount,
            } => format!(
                "💰 *New sale reported*\n\nSeller: {}\nOffer: {}\nType: {}\nAmount: {} {}\n\n⚠️ Awaiting approval. Check the payment proof in the admin dashboard.",
                seller_name, offer_title, sale_type, currency_symbol, amount
            ),
            Notification::ReviewSubmitted {
                offer_title,
                author_name,
                rating,
            } => format!(
                "📝 *New review pending*\n\nOffer: {}\nAuthor: {}\nRating: {} ({}/5)\n\nOpen the admin dashboard to moderate it.",
                offer_title,
                author_name,
                stars(*rating),
                rating
            ),
            Notification::RepeatReview {
                offer_title,
                author_name,
                rating,
                evaluation_number,
                previous_count,
            } => format!(
                "📝 *New review (REPEAT #{})*\n\n⚠️ This user already reviewed this offer {} time(s) before!\n\nOffer: {}\nAuthor: {}\nRating: {} ({}/5)\n\nCheck whether there was a new purchase before approving.",
                evaluation_number,
                previous_count,
                offer_title,
                author_name,
                stars(*rating),
                rating
            ),
            Notification::DisputeOpened {
                title,
                complainant_name,
                defendant_name,
            } => format!(
                "⚠️ *Mediation requested*\n\nTitle: {}\nComplainant: {}\nSeller: {}\n\nOpen the admin dashboard to mediate.",
                title, complainant_name, defendant_name
            ),
            Notification::SellerInterest {
                seller_name,
                offer_title,
                buyer_name,
            } => format!(
                "📩 *Interest in your offer!*\n\nHi {}!\n\n{} is interested in your listing: \"{}\"\n\nThey may reach out on WhatsApp at any moment. 🔔",
                seller_name, buyer_name, offer_title
            ),
        }
    }
}

fn stars(rating: u8) -> String {
    "⭐".repeat(rating.min(5) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_review_mentions_previous_count() {
        let text = Notification::RepeatReview {
            offer_title: "Bolo de cenoura".to_string(),
            author_name: "Ana".to_string(),
            rating: 4,
            evaluation_number: 3,
            previous_count: 2,
        }
        .render("R$");

        assert!(text.contains("REPEAT #3"));
        assert!(text.contains("2 time(s)"));
        assert!(text.contains("⭐⭐⭐⭐ (4/5)"));
    }

    #[test]
    fn test_sale_reported_renders_amount_with_currency() {
        let text = Notification::SaleReported {
            seller_name: "Carlos".to_string(),
            offer_title: "Conserto de bicicleta".to_string(),
            sale_type: SaleType::Service,
            amount: Money::from_cents(15000),
        }
        .render("R$");

        assert!(text.contains("Amount: R$ 150.00"));
        assert!(text.contains("Service provided"));
    }

    #[test]
    fn test_offer_pending_without_neighborhood() {
        let text = Notification::OfferPending {
            title: "Crochê".to_string(),
            owner_name: "Bia".to_string(),
            category: Category::Crafts,
            neighborhood: "  ".to_string(),
        }
        .render("R$");

        assert!(text.contains("*Neighborhood:* Not informed"));
    }
}
