//! The reports page with the spending charts, and the JSON API behind it.
//!
//! Charts are rendered as ECharts options with `charming`. The chart data is
//! scoped like everything else: admins see every user's expenses.

use std::{str::FromStr, sync::Arc};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::{Bar, Pie},
};
use maud::{Markup, PreEscaped, html};
use serde::Deserialize;
use serde_json::json;
use time::PrimitiveDateTime;

use crate::{
    AppState, Error,
    aggregation::{self, ChartData},
    auth::CurrentUser,
    endpoints,
    html::{CARD_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base},
    models::{Expense, UserId},
    navigation::NavBar,
    store::{ExpenseFilter, Store},
    timezone::local_now,
};

/// The state needed for the reports page and the chart API.
#[derive(Debug, Clone)]
pub struct ReportsState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for ReportsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            store: state.store.clone(),
        }
    }
}

/// The charts that the chart data API can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    /// Total per category.
    Category,
    /// Total per month of the current year.
    Monthly,
    /// Total of wanted versus unwanted expenses.
    ExpenseType,
}

impl FromStr for ChartType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(Self::Category),
            "monthly" => Ok(Self::Monthly),
            "expense_type" => Ok(Self::ExpenseType),
            other => Err(Error::InvalidChartType(other.to_owned())),
        }
    }
}

impl ChartType {
    fn data(self, expenses: &[Expense], now: PrimitiveDateTime) -> ChartData {
        match self {
            ChartType::Category => aggregation::by_category(expenses),
            ChartType::Monthly => aggregation::by_month(expenses, now.year()),
            ChartType::ExpenseType => aggregation::by_expense_type(expenses),
        }
    }
}

async fn visible_expenses(store: &dyn Store, user: &CurrentUser) -> Result<Vec<Expense>, Error> {
    store
        .get_expenses(&ExpenseFilter::owned_by(user.scope().owner_filter()).unordered())
        .await
}

/// The savings suggestions for the current user, based on their own
/// expenses this month.
async fn suggestions_for(
    store: &dyn Store,
    user: &CurrentUser,
    now: PrimitiveDateTime,
) -> Result<Vec<String>, Error> {
    let expenses = store
        .get_expenses(&ExpenseFilter::owned_by(Some(user.id())).unordered())
        .await?;
    let goal = store.get_savings_goal(user.id()).await?;

    Ok(aggregation::savings_suggestions(
        &expenses,
        user.0.monthly_income,
        goal.as_ref(),
        now.month(),
        now.year(),
    ))
}

/// A chart with its HTML container ID and ECharts configuration.
struct ReportChart {
    /// The HTML element ID to use for the chart (kebab-case)
    id: &'static str,
    /// The ECharts configuration as a JSON string
    options: String,
}

/// Display the charts and the savings suggestions.
pub async fn get_reports_page(
    State(state): State<ReportsState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    let store = state.store.as_ref();
    let now = local_now(&state.local_timezone)?;
    let expenses = visible_expenses(store, &user).await?;
    let suggestions = suggestions_for(store, &user, now).await?;

    let charts = [
        ReportChart {
            id: "category-chart",
            options: pie_chart(
                "Spending by Category",
                &ChartType::Category.data(&expenses, now),
            )
            .to_string(),
        },
        ReportChart {
            id: "monthly-chart",
            options: monthly_chart(now.year(), &ChartType::Monthly.data(&expenses, now))
                .to_string(),
        },
        ReportChart {
            id: "expense-type-chart",
            options: pie_chart(
                "Wanted vs Unwanted",
                &ChartType::ExpenseType.data(&expenses, now),
            )
            .to_string(),
        },
    ];

    Ok(reports_view(&user, &charts, &suggestions).into_response())
}

fn reports_view(user: &CurrentUser, charts: &[ReportChart], suggestions: &[String]) -> Markup {
    let nav_bar = NavBar::new(endpoints::REPORTS_VIEW, user.is_admin()).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-xl space-y-8"
            {
                h1 class="text-2xl font-bold" { "Reports" }

                section id="charts" class="w-full mx-auto"
                {
                    div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
                    {
                        @for chart in charts {
                            div id=(chart.id) class="min-h-[380px] rounded dark:bg-gray-100" {}
                        }
                    }
                }

                section id="savings-suggestions" class=(CARD_STYLE)
                {
                    h2 class="text-xl font-semibold mb-2" { "Savings Suggestions" }

                    @if suggestions.is_empty() {
                        p class="text-gray-500 dark:text-gray-400" { "Nothing to suggest yet." }
                    } @else {
                        ul class="list-disc list-inside space-y-1"
                        {
                            @for suggestion in suggestions {
                                li { (suggestion) }
                            }
                        }
                    }
                }
            }
        }
    };

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(charts),
    ];

    base("Reports", &scripts, &content)
}

/// Generates JavaScript initialization code for the charts, with dark mode
/// support and responsive resizing.
fn charts_script(charts: &[ReportChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chart = echarts.init(document.getElementById("{}"));
                    chart.setOption({});

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        chart.setTheme(darkModeMediaQuery.matches ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    HeadElement::ScriptSource(PreEscaped(format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
    )))
}

fn pie_chart(title: &str, data: &ChartData) -> Chart {
    let points: Vec<(f64, &str)> = data
        .data
        .iter()
        .zip(&data.labels)
        .map(|(value, label)| (*value, label.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text(title).left("center"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().left("left").top("bottom"))
        .series(Pie::new().name(title).radius(vec!["40%", "70%"]).data(points))
}

fn monthly_chart(year: i32, data: &ChartData) -> Chart {
    Chart::new()
        .title(
            Title::new()
                .text("Monthly Expenses")
                .subtext(year.to_string()),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .value_formatter(currency_formatter())
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(data.labels.clone()),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Expenses").data(data.data.clone()))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-IN', {
              style: 'currency',
              currency: 'INR'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

#[derive(Debug, Deserialize)]
pub struct ChartDataQuery {
    #[serde(rename = "type", default)]
    pub chart_type: Option<String>,
}

/// The series for one chart as `{labels, data}`.
///
/// A missing chart type means the category breakdown. An unknown chart type
/// is a 400 with `{error}`. If the expenses cannot be
/// loaded the response is a 500 that still carries a series the chart can
/// draw.
pub async fn get_chart_data(
    State(state): State<ReportsState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ChartDataQuery>,
) -> Response {
    let chart_type = match query
        .chart_type
        .as_deref()
        .map_or(Ok(ChartType::Category), str::parse::<ChartType>)
    {
        Ok(chart_type) => chart_type,
        Err(error) => return error.into_json_response(),
    };

    let data = match local_now(&state.local_timezone) {
        Ok(now) => visible_expenses(state.store.as_ref(), &user)
            .await
            .map(|expenses| chart_type.data(&expenses, now)),
        Err(error) => Err(error),
    };

    match data {
        Ok(data) => Json(data).into_response(),
        Err(error) => {
            tracing::error!("could not load chart data for {chart_type:?}: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "labels": ["Error loading data"],
                    "data": [0],
                    "error": error.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// The current user's savings suggestions as `{suggestions: [...]}`.
pub async fn get_savings_suggestions(
    State(state): State<ReportsState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    let suggestions = match local_now(&state.local_timezone) {
        Ok(now) => suggestions_for(state.store.as_ref(), &user, now).await,
        Err(error) => Err(error),
    };

    match suggestions {
        Ok(suggestions) => Json(json!({ "suggestions": suggestions })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// The total of a user's expenses as `{total_expenses}`.
///
/// Users may only ask about themselves, admins may ask about anyone.
pub async fn get_user_expenses(
    State(state): State<ReportsState>,
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
) -> Response {
    if let Err(error) = user.authorize(user_id) {
        return error.into_json_response();
    }

    match state
        .store
        .get_expenses(&ExpenseFilter::owned_by(Some(user_id)).unordered())
        .await
    {
        Ok(expenses) => {
            Json(json!({ "total_expenses": aggregation::total(&expenses) })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}
